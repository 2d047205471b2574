mod choice_picker;
mod command_input;
mod confirm_dialog;
mod input;
mod key_result;
mod policy_form;
mod search_input;
mod toast;

pub use choice_picker::ChoicePicker;
pub use command_input::CommandInput;
pub use confirm_dialog::ConfirmDialog;
pub use key_result::KeyResult;
pub use policy_form::{FormEvent, PolicyFormOverlay};
pub use search_input::{SearchEvent, SearchInput};
pub use toast::Toast;

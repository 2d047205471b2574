mod listing;
mod manage_policies;
mod policy_detail;
mod policy_list;
mod popular;

pub use manage_policies::ManagePoliciesView;
pub use policy_detail::PolicyDetailView;
pub use policy_list::PolicyListView;
pub use popular::PopularView;

mod reports;
mod resource_list;

pub use reports::ReportsView;
pub use resource_list::ResourceListView;

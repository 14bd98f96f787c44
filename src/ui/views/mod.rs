pub mod login;
pub mod task_detail;
pub mod task_list;

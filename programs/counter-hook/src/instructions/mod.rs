pub mod initialize_counter;
pub mod initialize_extra_account_meta_list;
pub mod transfer_hook;

pub use initialize_counter::*;
pub use initialize_extra_account_meta_list::*;
pub use transfer_hook::*;

pub mod command_overlay;
pub mod footer;
pub mod header;
pub mod utils;

pub use command_overlay::draw_command_overlay;
pub use footer::draw_footer;
pub use header::draw_header;
pub use utils::{date_color, truncate};

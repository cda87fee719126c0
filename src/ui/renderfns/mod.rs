pub mod footer;
pub mod header;
pub mod utils;

pub use footer::draw_footer;
pub use header::draw_header;
pub use utils::{count_style, gate_label, gate_style, severity_color, truncate};

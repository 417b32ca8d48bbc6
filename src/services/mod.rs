mod content;

pub use content::prepare_content;

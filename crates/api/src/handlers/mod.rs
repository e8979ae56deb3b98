pub mod generate;
pub mod previews;

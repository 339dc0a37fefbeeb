pub mod pdf_images;
pub mod pdf_split;
pub mod pdf_trim;
pub mod rename_olympiad;
pub mod rename_pictures;

pub mod compositor;
pub mod layout;
pub mod resize;
pub mod text;
pub mod title_card;

pub mod bazaar;
pub mod items;

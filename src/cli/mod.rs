pub mod extract;
pub mod slotify;

mod common;
mod inventory;

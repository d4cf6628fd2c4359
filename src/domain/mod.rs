pub mod commit;
pub mod ticket;

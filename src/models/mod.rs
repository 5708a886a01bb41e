pub mod scan_log;
pub mod ticket;

pub use scan_log::TicketScanLog;
pub use ticket::Ticket;

// Core module - Session logic independent of the terminal
pub mod communication;
pub mod format;
pub mod session;

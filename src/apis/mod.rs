pub mod seatgeek;

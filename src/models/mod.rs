pub mod customer;
pub mod invoice;
pub mod money;
pub mod schedule;
pub mod seat;
pub mod stats;

pub use customer::{Connection, Customer};
pub use invoice::Invoice;
pub use money::format_minor_units;
pub use schedule::{Phase, PhaseProduct, Schedule};
pub use seat::{
    NewSeatEvent, SeatChange, SeatChangePreview, SeatEvent, SeatEventCreated, SeatEventType,
    SeatInvoiceInfo, SeatMeter,
};
pub use stats::DashboardStats;

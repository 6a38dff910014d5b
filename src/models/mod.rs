//! Data models for the clinic booking server

pub mod admin;
pub mod availability;
pub mod booking;
pub mod doctor;
pub mod service;

// Re-export commonly used types
pub use availability::{DayAvailability, SlotAvailability};
pub use booking::{
    Booking, BookingStatus, BookingWithService, BookingsOverview, CreateBookingRequest, NewBooking, StatusCounts,
};
pub use doctor::Doctor;
pub use service::{Service, ServiceKind};

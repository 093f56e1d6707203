pub mod assistant;
pub mod booking;
pub mod directory;
pub mod domain;
pub mod otp;
pub mod ports;
pub mod validation;

pub use domain::{
    AcceptanceEmail, Booking, BookingStats, BookingStatus, ChatMessage, ChatRole,
    Doctor, DoctorCredentials, DoctorProfileUpdate, DoctorStatus, EmailQueueEntry, EmailStatus,
    NewBooking, NewDoctor, OtpRecord,
};
pub use ports::{
    DatabaseService, EmailService, PortError, PortResult, SmsService, SymptomAssistantService,
};

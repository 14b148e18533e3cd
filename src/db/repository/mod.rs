pub mod bookings;
pub mod class_days;
pub mod students;

pub use bookings::BookingRepository;
pub use class_days::ClassDayRepository;
pub use students::StudentRepository;

pub mod booking;
pub mod message;
pub mod profile;
pub mod service;

pub use booking::{Booking, BookingDetail, BookingStatus, ServiceSummary};
pub use message::{Conversation, ConversationBooking, LastMessage, Message, Participant};
pub use profile::{display_name, AccountStatus, Profile, Role};
pub use service::{PricingModel, Service, ServiceCategory, ServiceStatus};

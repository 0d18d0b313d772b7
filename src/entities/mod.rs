pub mod alert;
pub mod chat_message;
pub mod check_in;
pub mod exam;
pub mod user;

pub use alert::Entity as Alerts;
pub use chat_message::Entity as ChatMessages;
pub use check_in::Entity as CheckIns;
pub use exam::Entity as Exams;
pub use user::Entity as Users;

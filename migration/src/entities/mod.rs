pub mod page_view;
pub mod session_duration;
pub mod visitor;

pub use page_view::Entity as PageViewEntity;
pub use session_duration::Entity as SessionDurationEntity;
pub use visitor::Entity as VisitorEntity;

pub mod comment;
pub mod lesson;
pub mod profile;
pub mod progress;
pub mod subject;
pub mod user;

pub use comment::{Comment, CommentAuthor};
pub use lesson::{Lesson, LessonPatch, NewLesson};
pub use profile::{Profile, ProfilePatch, Role};
pub use progress::{LessonProgress, UserProgress};
pub use subject::{NewSubject, Subject, SubjectPatch, SubjectWithProgress};
pub use user::{AccessClaims, Session, User, UserMetadata};

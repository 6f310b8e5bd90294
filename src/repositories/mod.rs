pub mod comment_repository;
pub mod lesson_repository;
pub mod profile_supabase_repo;
pub mod progress_repository;
pub mod rest;
pub mod storage_repository;
pub mod subject_repository;

pub use comment_repository::CommentRepository;
pub use lesson_repository::LessonRepository;
pub use profile_supabase_repo::{ProfileSource, ProfileSupabaseRepo};
pub use progress_repository::ProgressRepository;
pub use rest::RestClient;
pub use storage_repository::StorageRepository;
pub use subject_repository::SubjectRepository;

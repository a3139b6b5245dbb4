mod file_repository;

pub use file_repository::FileRepository;

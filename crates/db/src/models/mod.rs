pub mod course;
pub mod learning_path;
pub mod learning_path_course;

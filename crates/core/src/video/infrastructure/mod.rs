pub mod ffmpeg_capture_device;
pub mod image_file_reader;
pub mod image_file_writer;

pub mod audio_generator;

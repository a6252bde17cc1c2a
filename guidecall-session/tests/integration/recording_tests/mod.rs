mod test_destroy_releases_recorder;
mod test_frame_recording_is_saved_to_directory;
mod test_save_requires_stopped_recording;
mod test_stop_without_recording;

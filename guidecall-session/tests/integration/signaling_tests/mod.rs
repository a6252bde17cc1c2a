mod test_data_failure_closes_media;
mod test_destroy_is_idempotent;
mod test_manager_registers_with_rendezvous;
mod test_open_failure_reports_error;
mod test_opened_after_media_then_data;
mod test_reinitialize_releases_previous_session;

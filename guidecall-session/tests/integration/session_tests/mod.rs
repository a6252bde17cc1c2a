mod test_abandoned_session_skips_prompts;
mod test_close_failure_keeps_session_running;
mod test_initialization_error;

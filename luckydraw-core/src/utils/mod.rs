pub mod trigger_time;

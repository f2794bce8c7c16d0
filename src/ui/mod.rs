pub mod form_window;

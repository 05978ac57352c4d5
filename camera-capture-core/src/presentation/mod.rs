pub mod device_picker;

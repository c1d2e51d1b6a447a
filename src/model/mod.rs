pub mod attendance_record;
pub mod device;
pub mod employee;
pub mod policy;
pub mod recognition_event;
pub mod shift;

pub use attendance_record::{AttendanceRecord, AttendanceStatus, EventType, RecordStatus};
pub use device::{Device, DeviceStatus};
pub use employee::{Employee, EmployeeStatus};
pub use policy::{AttendancePolicy, PolicyWithShift};
pub use recognition_event::{FaceBox, RecognitionEvent, RecognitionStatus};
pub use shift::Shift;

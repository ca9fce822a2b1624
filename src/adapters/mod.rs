//! Adapters — concrete implementations of the port traits.
//!
//! | Adapter          | Implements              | Connects to               |
//! |------------------|-------------------------|---------------------------|
//! | `serial`         | Link, LinkOpener        | one serial device         |
//! |                  | ChannelBank             | one serial device per slot|
//! | `command_source` | ReadingSource           | `sh -c` temperature tools |
//! | `sysfs_pwm`      | SetDutyCycle            | /sys/class/pwm            |
//! | `hwmon`          | Tachometer              | /sys/class/hwmon          |
//! | `time`           | Clock, DelayNs          | std::time / thread::sleep |
//! | `log_sink`       | EventSink               | `log` facade              |
//! | `config_store`   | ConfigPort              | JSON file                 |

pub mod command_source;
pub mod config_store;
pub mod hwmon;
pub mod log_sink;
pub mod serial;
pub mod sysfs_pwm;
pub mod time;

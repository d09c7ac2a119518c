use libc::{sysconf, _SC_CLK_TCK};

use crate::procfs::ProcfsError;

/// Returns the number of clock ticks per second of the system
pub fn clock_ticks() -> Result<u64, ProcfsError> {
    let clock_ticks_value;

    unsafe {
        clock_ticks_value = sysconf(_SC_CLK_TCK);
    }

    match clock_ticks_value {
        value if value <= 0 => Err(ProcfsError::SysconfError),
        value => Ok(value as u64),
    }
}

#[cfg(test)]
mod test_clock_ticks {
    use crate::procfs::sysconf::clock_ticks;

    #[test]
    fn test_should_get_clock_ticks() {
        let ticks = clock_ticks().expect("Could not get clock ticks");

        assert!(ticks > 0);
    }
}

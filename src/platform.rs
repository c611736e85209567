//! Keeping the measurement thread quiet, and software prefetch hints.
use log::{info, warn};

/// Pin the calling thread to `cpu_core` (if given) and raise it to maximum priority (if asked).
///
/// Failures only degrade measurement stability, so they're logged and otherwise ignored.
pub fn prepare_measurement_thread(cpu_core: Option<usize>, raise_priority: bool) {
    if let Some(cpu_num) = cpu_core {
        let core_num = core_affinity::CoreId { id: cpu_num };
        if core_affinity::set_for_current(core_num) {
            info!("Benchmark thread pinned to CPU core {}", cpu_num);
        } else {
            warn!(
                "Couldn't pin benchmark thread to CPU core {} (NOTE: this is expected on macOS)",
                cpu_num
            );
        }
    }

    if raise_priority
        && thread_priority::set_current_thread_priority(thread_priority::ThreadPriority::Max)
            .is_err()
    {
        warn!("Couldn't set benchmark thread to maximum thread priority");
    }
}

/// Hint the CPU to pull the cache line holding `addr` into all cache levels. No-op where the
/// architecture has no stable prefetch intrinsic.
#[inline(always)]
pub fn prefetch_read<T>(addr: *const T) {
    #[cfg(target_arch = "x86_64")]
    {
        // SAFETY: prefetch is a hint and never faults, even for invalid addresses
        unsafe {
            std::arch::x86_64::_mm_prefetch::<{ std::arch::x86_64::_MM_HINT_T0 }>(addr as *const i8);
        }
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        let _ = addr;
    }
}

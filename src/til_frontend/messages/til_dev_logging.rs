// WALKER LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_walk")]
macro_rules! walk_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_walk"))]
macro_rules! walk_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}

// SSA LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_ssa")]
macro_rules! ssa_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_ssa"))]
macro_rules! ssa_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}

// Dumps every finished graph as soon as it is built
#[macro_export]
#[cfg(feature = "show_til")]
macro_rules! til_log {
    ($scfg:expr, $ast:expr) => {
        saying::say!(
            "\n",
            $crate::til_frontend::til::til_display::render_scfg(
                $scfg,
                $ast,
                &$crate::til_frontend::til::til_display::TilDisplayOptions::default()
            )
        );
    };
}

#[macro_export]
#[cfg(not(feature = "show_til"))]
macro_rules! til_log {
    ($scfg:expr, $ast:expr) => {
        // Nothing
    };
}

// Extra timer logging
#[macro_export]
#[cfg(feature = "detailed_timers")]
macro_rules! timer_log {
    ($time:expr, $msg:expr) => {
        saying::say!($msg, Green #$time.elapsed());
    };
}

#[macro_export]
#[cfg(not(feature = "detailed_timers"))]
macro_rules! timer_log {
    ($time:expr, $msg:expr) => {
        // Nothing
    };
}

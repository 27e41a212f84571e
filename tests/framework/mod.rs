use deimos::prelude::*;

/// Creates a headless deimos context ready for automated tests.
///
/// Returns `None` when Vulkan cannot be initialized on this machine (no loader or
/// no usable device), so device-dependent tests skip instead of failing on
/// machines without a GPU or software rasterizer.
pub fn make_context() -> Option<Context> {
    let settings = AppBuilder::new()
        .name("deimos test framework")
        .version((0, 0, 1))
        .validation(false)
        .build();

    match deimos::initialize(&settings) {
        Ok(context) => Some(context),
        Err(err) => {
            eprintln!("Skipping device-dependent test, Vulkan unavailable: {err:#}");
            None
        }
    }
}

use anyhow::Result;

mod framework;

#[test]
pub fn can_initialize() -> Result<()> {
    let Some(context) = framework::make_context() else {
        return Ok(());
    };
    context.wait_idle()?;
    Ok(())
}

#[test]
pub fn headless_context_has_no_surface() -> Result<()> {
    let Some(context) = framework::make_context() else {
        return Ok(());
    };
    assert!(context.surface.is_none());
    Ok(())
}

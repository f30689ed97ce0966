use tokio::sync::watch;

/// Resolve once the flag is raised or its sender is dropped.
pub(crate) async fn raised(flag: &mut watch::Receiver<bool>) {
    let _ = flag.wait_for(|raised| *raised).await;
}

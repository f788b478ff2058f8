/// Side-effect channel for user-visible error text.
///
/// The transport layer is the only caller; higher layers never notify for a
/// failure that already went through here.
pub trait Notifier: Send + Sync {
    fn notify_error(&self, message: &str);
}

/// Routes notifications into the log under the `notification` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_error(&self, message: &str) {
        tracing::error!(target: "notification", "{}", message);
    }
}

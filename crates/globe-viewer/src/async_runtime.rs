//! Background work whose result comes back to the ECS over a channel.
//!
//! A system hands [`BackgroundTasks::deliver`] a future and the sending half
//! of an `async_channel`; the future runs off the main schedule and its
//! output is sent once it completes. Systems poll the receiving half.
//!
//! Native builds run on a Tokio runtime (reqwest needs one). WASM builds run
//! on Bevy's async compute pool, where reqwest uses the browser's fetch.

use std::future::Future;

use async_channel::Sender;
use bevy::prelude::*;

/// Plugin that provides the runtime behind [`BackgroundTasks`].
///
/// Safe to add more than once.
pub struct AsyncRuntimePlugin;

impl Plugin for AsyncRuntimePlugin {
    fn build(&self, app: &mut App) {
        #[cfg(not(target_family = "wasm"))]
        if !app.is_plugin_added::<bevy_tokio_tasks::TokioTasksPlugin>() {
            app.add_plugins(bevy_tokio_tasks::TokioTasksPlugin::default());
        }

        #[cfg(target_family = "wasm")]
        let _ = app;
    }

    fn is_unique(&self) -> bool {
        false
    }
}

/// Run `future` and send its output on `tx`.
async fn run_and_send<T, F>(name: &'static str, tx: Sender<T>, future: F)
where
    F: Future<Output = T>,
{
    let output = future.await;
    if tx.send(output).await.is_err() {
        tracing::debug!("{name}: receiver dropped before the result arrived");
    }
}

#[cfg(not(target_family = "wasm"))]
mod native {
    use std::future::Future;

    use async_channel::Sender;
    use bevy::ecs::system::SystemParam;
    use bevy::prelude::*;

    /// Runs futures in the background and delivers their output.
    #[derive(SystemParam)]
    pub struct BackgroundTasks<'w, 's> {
        runtime: Res<'w, bevy_tokio_tasks::TokioTasksRuntime>,
        #[allow(dead_code)]
        _local: Local<'s, ()>,
    }

    impl BackgroundTasks<'_, '_> {
        /// Run `future` and send its output on `tx` when it completes.
        pub fn deliver<T, F>(&self, name: &'static str, tx: Sender<T>, future: F)
        where
            T: Send + 'static,
            F: Future<Output = T> + Send + 'static,
        {
            tracing::debug!("{name}: started");
            self.runtime
                .spawn_background_task(move |_ctx| super::run_and_send(name, tx, future));
        }
    }
}

#[cfg(target_family = "wasm")]
mod wasm {
    use std::future::Future;

    use async_channel::Sender;
    use bevy::ecs::system::SystemParam;
    use bevy::prelude::*;
    use bevy::tasks::AsyncComputeTaskPool;

    /// Runs futures in the background and delivers their output.
    #[derive(SystemParam)]
    pub struct BackgroundTasks<'w, 's> {
        #[allow(dead_code)]
        _local: Local<'s, ()>,
        #[allow(dead_code)]
        _marker: std::marker::PhantomData<&'w ()>,
    }

    impl BackgroundTasks<'_, '_> {
        /// Run `future` and send its output on `tx` when it completes.
        ///
        /// The browser is single-threaded, so nothing here needs to be `Send`.
        pub fn deliver<T, F>(&self, name: &'static str, tx: Sender<T>, future: F)
        where
            T: 'static,
            F: Future<Output = T> + 'static,
        {
            tracing::debug!("{name}: started");
            AsyncComputeTaskPool::get()
                .spawn_local(super::run_and_send(name, tx, future))
                .detach();
        }
    }
}

#[cfg(not(target_family = "wasm"))]
pub use native::BackgroundTasks;
#[cfg(target_family = "wasm")]
pub use wasm::BackgroundTasks;

#[cfg(all(test, not(target_family = "wasm")))]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    #[derive(Resource)]
    struct Results(async_channel::Sender<u32>);

    fn start_task(tasks: BackgroundTasks, results: Res<Results>) {
        tasks.deliver("answer", results.0.clone(), async { 42 });
    }

    #[test]
    fn test_output_is_delivered_on_the_channel() {
        let (tx, rx) = async_channel::bounded(1);
        let mut app = App::new();
        app.add_plugins((AsyncRuntimePlugin, AsyncRuntimePlugin))
            .insert_resource(Results(tx))
            .add_systems(Startup, start_task);
        app.update();

        let deadline = Instant::now() + Duration::from_secs(5);
        let value = loop {
            if let Ok(value) = rx.try_recv() {
                break value;
            }
            assert!(Instant::now() < deadline, "no result delivered");
            std::thread::sleep(Duration::from_millis(10));
        };
        assert_eq!(value, 42);
    }
}

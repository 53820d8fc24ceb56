//! Where the lookup loop of [`crate::LoadCoordinator`] runs. Every URL cache future is polled
//! here, never on the caller's thread, so a slow cache cannot stall a frame. On native targets
//! this is a dedicated thread, in the browser it is the page's event loop.
#[cfg(not(target_arch = "wasm32"))]
pub(crate) use native::*;

#[cfg(target_arch = "wasm32")]
pub(crate) use web::*;

#[cfg(target_arch = "wasm32")]
mod web {
    /// Lookups share the browser's event loop with everything else. Nothing to stop on drop,
    /// the loop ends by itself once the coordinator's channels close.
    pub struct Runtime;

    impl Runtime {
        pub fn new<F>(lookup_loop: F) -> Self
        where
            F: std::future::Future<Output = ()> + 'static,
        {
            wasm_bindgen_futures::spawn_local(lookup_loop);
            Self {}
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    /// Single threaded Tokio runtime on the `keyed_tiles-io` thread. Dropping it abandons lookups
    /// still in flight and joins the thread.
    pub struct Runtime {
        join_handle: Option<std::thread::JoinHandle<()>>,
        quit_tx: tokio::sync::mpsc::UnboundedSender<()>,
    }

    impl Runtime {
        pub fn new<F>(lookup_loop: F) -> Self
        where
            F: std::future::Future + Send + 'static,
            F::Output: Send,
        {
            let (quit_tx, mut quit_rx) = tokio::sync::mpsc::unbounded_channel();

            let join_handle = std::thread::Builder::new()
                .name("keyed_tiles-io".to_owned())
                .spawn(move || {
                    let runtime = tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                        .expect("could not create the Tokio runtime, tile lookups will not work");

                    runtime.spawn(lookup_loop);
                    runtime.block_on(quit_rx.recv());
                })
                .inspect_err(|err| log::error!("Could not spawn the lookup thread: {err}."))
                .ok();

            Self {
                join_handle,
                quit_tx,
            }
        }
    }

    impl Drop for Runtime {
        fn drop(&mut self) {
            // Lookup thread might be dead, nothing to do in this case.
            let _ = self.quit_tx.send(());

            if let Some(join_handle) = self.join_handle.take() {
                log::debug!("Waiting for the lookup thread to exit.");
                let _ = join_handle.join();
            }

            log::debug!("Lookup thread is down.");
        }
    }
}

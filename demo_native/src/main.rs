//! Shows a patch of tiles, whose URLs are resolved through a URL cache.
//!
//! By default, keys are translated into OpenStreetMap URLs locally, with a varying delay and the
//! occasional miss. Set `KEYED_TILES_LOOKUP_URL` to ask an HTTP lookup service instead.

#[cfg(not(target_arch = "wasm32"))]
mod app {
    use std::sync::Arc;
    use std::time::Duration;

    use egui::{Color32, Context, RichText};
    use keyed_tiles::upstream::{HttpUrlCache, MemoizedUrlCache};
    use keyed_tiles::{
        Attribution, CallbackUrlCache, LookupKey, Responder, TileCoord, TileState, TileUrlCache,
        UrlCacheTiles,
    };

    /// Size of the visible patch, in tiles.
    const PATCH: i64 = 4;

    /// Parse `/{z}/x{x}/y{y}` back into its numbers.
    fn parse_key(key: &LookupKey) -> Option<(u8, i64, i64)> {
        let mut parts = key.as_str().split('/').skip(1);
        let zoom = parts.next()?.parse().ok()?;
        let x = parts.next()?.strip_prefix('x')?.parse().ok()?;
        let y = parts.next()?.strip_prefix('y')?.parse().ok()?;
        Some((zoom, x, y))
    }

    /// Pretends to be a remote URL cache. Every seventh key has no URL.
    fn local_url_cache() -> impl TileUrlCache {
        CallbackUrlCache::new(|key: &LookupKey, responder: Responder| {
            let Some((zoom, x, y)) = parse_key(key) else {
                responder.respond(None);
                return;
            };

            let url = ((x + y) % 7 != 6)
                .then(|| format!("https://tile.openstreetmap.org/{zoom}/{x}/{y}.png"));
            let delay = Duration::from_millis(100 + 50 * (x + y).rem_euclid(5).unsigned_abs());

            std::thread::spawn(move || {
                std::thread::sleep(delay);
                responder.respond(url);
            });
        })
    }

    fn url_cache() -> Arc<dyn TileUrlCache> {
        match std::env::var("KEYED_TILES_LOOKUP_URL") {
            Ok(base_url) => match HttpUrlCache::new(&*base_url) {
                Ok(http) => {
                    log::info!("Looking up tiles at {base_url}.");
                    return Arc::new(MemoizedUrlCache::new(http));
                }
                Err(err) => log::error!("Cannot use {base_url}: {err}"),
            },
            Err(_) => log::info!("Resolving keys locally."),
        }

        Arc::new(MemoizedUrlCache::new(local_url_cache()))
    }

    pub struct MyApp {
        tiles: UrlCacheTiles,
        zoom: u8,
        origin: (i64, i64),
    }

    impl MyApp {
        pub fn new(egui_ctx: Context) -> Result<Self, keyed_tiles::Error> {
            egui_extras::install_image_loaders(&egui_ctx);

            let options = keyed_tiles::TileSourceOptions {
                attribution: Attribution {
                    text: "OpenStreetMap contributors",
                    url: "https://www.openstreetmap.org/copyright",
                    logo_light: None,
                    logo_dark: None,
                },
                ..Default::default()
            };

            let tiles = UrlCacheTiles::builder()
                .url_cache(url_cache())
                .options(options)
                .build(egui_ctx)?;

            Ok(Self {
                tiles,
                zoom: 4,
                origin: (7, -5),
            })
        }

        fn controls(&mut self, ui: &mut egui::Ui) {
            ui.horizontal(|ui| {
                if ui.button("⬅").clicked() {
                    self.origin.0 -= 1;
                }
                if ui.button("➡").clicked() {
                    self.origin.0 += 1;
                }
                if ui.button("⬆").clicked() {
                    self.origin.1 += 1;
                }
                if ui.button("⬇").clicked() {
                    self.origin.1 -= 1;
                }
                if ui.button("Refresh").clicked() {
                    self.tiles.refresh();
                }

                let stats = self.tiles.stats();
                ui.label(format!(
                    "zoom {}, pending {}, failures {}",
                    self.zoom, stats.pending, stats.failures
                ));
            });
        }

        fn patch(&mut self, ui: &mut egui::Ui) {
            let size = self.tiles.tile_size() as f32 / 2.;

            egui::Grid::new("tiles")
                .spacing([0., 0.])
                .show(ui, |ui| {
                    for row in 0..PATCH {
                        for column in 0..PATCH {
                            let coord = TileCoord::new(
                                self.zoom,
                                self.origin.0 + column,
                                self.origin.1 - row,
                            );
                            self.cell(ui, coord, size);
                        }
                        ui.end_row();
                    }
                });
        }

        fn cell(&mut self, ui: &mut egui::Ui, coord: TileCoord, size: f32) {
            let (rect, _) = ui.allocate_exact_size(egui::vec2(size, size), egui::Sense::hover());

            let Some(tile) = self.tiles.tile(coord) else {
                return;
            };

            match (tile.state(), tile.src()) {
                (TileState::Error, _) => {
                    ui.painter().rect_filled(rect, 0., Color32::DARK_RED);
                    let retry = ui.put(rect, egui::Button::new(RichText::new("retry").small()));
                    if retry.clicked() {
                        self.tiles.retry(coord);
                    }
                }
                (_, Some(src)) => {
                    ui.put(rect, egui::Image::new(src).fit_to_exact_size(rect.size()));
                }
                _ => {
                    ui.painter().rect_filled(rect, 0., Color32::from_gray(40));
                    ui.put(rect, egui::Spinner::new());
                }
            }
        }
    }

    impl eframe::App for MyApp {
        fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
            for tile in self.tiles.poll() {
                // From here on, egui's image loaders take care of the tile.
                tile.set_state(TileState::Loaded);
            }

            egui::CentralPanel::default().show(ctx, |ui| {
                self.controls(ui);
                self.patch(ui);
                ui.hyperlink_to(
                    self.tiles.attribution().text,
                    self.tiles.attribution().url,
                );
            });
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), eframe::Error> {
    env_logger::init();
    eframe::run_native(
        "keyed_tiles demo",
        Default::default(),
        Box::new(|cc| {
            let app = app::MyApp::new(cc.egui_ctx.clone())?;
            Ok(Box::new(app))
        }),
    )
}

#[cfg(target_arch = "wasm32")]
fn main() {
    println!("This demo is not meant to be compiled for WASM.");
}

use tauri::{
    image::Image,
    menu::{Menu, MenuItem},
    tray::{TrayIcon, TrayIconBuilder},
    App,
};

use crate::display::{StatusColor, StatusDisplay, LOADING_TOKEN, READY_TOKEN};

const TRAY_ID: &str = "status";
const ICON_SIZE: u32 = 32;

pub fn build(app: &App) -> tauri::Result<TrayIcon> {
    let toggle_item = MenuItem::with_id(app, "toggle", "Toggle GUI visibility", true, None::<&str>)?;
    let quit_item = MenuItem::with_id(app, "quit", "Quit", true, None::<&str>)?;
    let menu = Menu::with_items(app, &[&toggle_item, &quit_item])?;

    TrayIconBuilder::with_id(TRAY_ID)
        .icon(square(StatusColor::Green))
        .tooltip(READY_TOKEN)
        .menu(&menu)
        .on_menu_event(move |app, event| match event.id.as_ref() {
            "toggle" => super::toggle_window(app),
            "quit" => super::request_shutdown(app),
            _ => {}
        })
        .build(app)
}

/// Solid square in the state color; the text itself goes to tooltip and title.
fn square(color: StatusColor) -> Image<'static> {
    let rgba = image::RgbaImage::from_pixel(ICON_SIZE, ICON_SIZE, image::Rgba(color.rgba()));
    let (w, h) = rgba.dimensions();
    Image::new_owned(rgba.into_raw(), w, h)
}

/// [`StatusDisplay`] backed by the tray icon.
pub struct TrayStatus {
    tray: TrayIcon,
}

impl TrayStatus {
    pub fn new(tray: TrayIcon) -> Self {
        Self { tray }
    }

    fn apply(&self, text: &str, color: StatusColor) {
        let result = self
            .tray
            .set_icon(Some(square(color)))
            .and_then(|_| self.tray.set_tooltip(Some(text)))
            .and_then(|_| self.tray.set_title(Some(text)));
        if let Err(e) = result {
            log::error!("TRAYICON: failed to update icon: {}", e);
        }
    }
}

impl StatusDisplay for TrayStatus {
    fn show_loading(&self) {
        log::debug!("TRAYICON: Displaying loading icon...");
        self.apply(LOADING_TOKEN, StatusColor::Navy);
    }

    fn show_text(&self, text: &str, color: StatusColor) {
        self.apply(text, color);
    }
}

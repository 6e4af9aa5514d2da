use ratatui::style::Color;

// HUD palette. Cyan on near-black, one helper per role so renderers never
// hard-code colors.

pub const ACCENT_RGB: (u8, u8, u8) = (0, 255, 255);
pub const ACCENT_DIM_RGB: (u8, u8, u8) = (0, 140, 140);
pub const HIGHLIGHT_RGB: (u8, u8, u8) = (255, 200, 0);

pub fn rgb_to_color(rgb: (u8, u8, u8)) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

pub fn accent() -> Color {
    rgb_to_color(ACCENT_RGB)
}

pub fn accent_dim() -> Color {
    rgb_to_color(ACCENT_DIM_RGB)
}

// Window chrome
pub fn window_bg() -> Color {
    Color::Rgb(4, 16, 20)
}
pub fn window_fg() -> Color {
    Color::Gray
}
pub fn header_bg() -> Color {
    Color::Rgb(0, 60, 70)
}
pub fn header_fg() -> Color {
    accent()
}
pub fn header_button_fg() -> Color {
    Color::White
}
pub fn border() -> Color {
    accent_dim()
}
pub fn border_dragging() -> Color {
    accent()
}

// Section content
pub fn section_title() -> Color {
    accent()
}
pub fn label() -> Color {
    accent_dim()
}
pub fn link() -> Color {
    Color::LightBlue
}
pub fn placeholder() -> Color {
    Color::DarkGray
}
pub fn error() -> Color {
    Color::LightRed
}
pub fn table_header() -> Color {
    accent()
}
pub fn table_highlight_bg() -> Color {
    rgb_to_color(HIGHLIGHT_RGB)
}
pub fn table_highlight_fg() -> Color {
    Color::Black
}

/// Series colors used when a dataset does not name one.
pub fn series(index: usize) -> Color {
    const SERIES: [Color; 5] = [
        Color::Cyan,
        Color::Magenta,
        Color::Yellow,
        Color::LightGreen,
        Color::LightBlue,
    ];
    SERIES[index % SERIES.len()]
}

// Bottom row: tray entries and status
pub fn tray_bg() -> Color {
    Color::Rgb(0, 30, 36)
}
pub fn tray_fg() -> Color {
    accent()
}
pub fn status_fg() -> Color {
    Color::Gray
}
pub fn status_busy_fg() -> Color {
    rgb_to_color(HIGHLIGHT_RGB)
}

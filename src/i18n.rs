use std::collections::BTreeMap;

use crate::settings::Language;

type Table = &'static [(&'static str, &'static str)];

const EN: Table = &[
    ("settings", "Settings"),
    ("theme", "Theme"),
    ("dark", "Dark"),
    ("light", "Light"),
    ("cities", "Cities"),
    ("addCity", "Add City"),
    ("searchCity", "Search city..."),
    ("search", "Search"),
    ("timeFormat", "Time Format"),
    ("temperatureUnit", "Temperature Unit"),
    ("language", "Language"),
    ("close", "Close"),
    ("changeMain", "Change"),
    ("makeMain", "Make Main"),
    ("main", "Main"),
    ("maxCitiesError", "Maximum 2 additional cities allowed!"),
    ("cityExistsError", "This city is already in your list!"),
    ("weatherError", "fetch weather data"),
    ("forecastError", "fetch forecast data"),
    ("geocodeError", "search cities"),
];

const TR: Table = &[
    ("settings", "Ayarlar"),
    ("theme", "Tema"),
    ("dark", "Koyu"),
    ("light", "Açık"),
    ("cities", "Şehirler"),
    ("addCity", "Şehir Ekle"),
    ("searchCity", "Şehir ara..."),
    ("search", "Ara"),
    ("timeFormat", "Saat Formatı"),
    ("temperatureUnit", "Sıcaklık Birimi"),
    ("language", "Dil"),
    ("close", "Kapat"),
    ("changeMain", "Değiştir"),
    ("makeMain", "Ana Şehir Yap"),
    ("main", "Ana"),
    ("maxCitiesError", "En fazla 2 ek şehir eklenebilir!"),
    ("cityExistsError", "Bu şehir zaten listenizde!"),
    ("weatherError", "hava durumu verisi alınamadı"),
    ("forecastError", "tahmin verisi alınamadı"),
    ("geocodeError", "şehir araması yapılamadı"),
];

fn table(language: Language) -> Table {
    match language {
        Language::En => EN,
        Language::Tr => TR,
    }
}

/// Looks up `key`, falling back to the key itself.
pub fn translate(language: Language, key: &str) -> &str {
    table(language)
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .unwrap_or(key)
}

/// Every UI string for `language`, keyed by translation key.
pub fn texts(language: Language) -> BTreeMap<String, String> {
    table(language)
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

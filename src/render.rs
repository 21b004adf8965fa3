//! Choropleth pages built around a plotly.js `choroplethmap` trace.

use serde_json::{Value, json};

use crate::correspondence::CountrySeries;
use crate::domain::Year;
use crate::error::GhgError;

pub const PLOTLY_JS_URL: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";
pub const PAGE_TITLE: &str = "Emission Plot";

const MAP_STYLE: &str = "carto-positron";
const MAP_ZOOM: f64 = 3.0;
const MAP_CENTER: (f64, f64) = (37.0902, -95.7129);
const MAP_OPACITY: f64 = 0.5;

const ICEFIRE: [&str; 17] = [
    "#000000", "#001f4d", "#003786", "#0e58a8", "#217eb8", "#30a4ca", "#54c8df", "#9be4ef",
    "#e1e9d1", "#f3d573", "#e7b000", "#da8200", "#c65400", "#ac2301", "#820000", "#4c0000",
    "#000000",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    Icefire,
    Viridis,
}

impl Palette {
    /// Even years and odd years get different palettes.
    pub fn for_year(year: Year) -> Self {
        if year.is_even() {
            Palette::Icefire
        } else {
            Palette::Viridis
        }
    }

    pub fn colorscale(&self) -> Value {
        match self {
            Palette::Viridis => json!("Viridis"),
            Palette::Icefire => {
                let last = (ICEFIRE.len() - 1) as f64;
                Value::Array(
                    ICEFIRE
                        .iter()
                        .enumerate()
                        .map(|(i, color)| json!([i as f64 / last, color]))
                        .collect(),
                )
            }
        }
    }
}

/// Natural log of an emission; non-positive values have no logarithm and are
/// left blank on the map.
pub fn log_emission(value: i64) -> Option<f64> {
    (value > 0).then(|| (value as f64).ln())
}

pub fn figure(year: Year, countries: &CountrySeries, geojson: &Value) -> Value {
    let (locations, values): (Vec<&str>, Vec<Option<f64>>) = countries
        .iter()
        .map(|(country, value)| (country.as_str(), log_emission(value)))
        .unzip();
    let raw = countries.iter().map(|(_, value)| value).collect::<Vec<_>>();

    json!({
        "data": [{
            "type": "choroplethmap",
            "geojson": geojson,
            "locations": locations,
            "z": values,
            "customdata": raw,
            "colorscale": Palette::for_year(year).colorscale(),
            "colorbar": { "title": { "text": "emission_log" } },
            "marker": { "opacity": MAP_OPACITY },
            "hovertemplate": "%{location}<br>emission=%{customdata}<br>emission_log=%{z:.3f}<extra></extra>",
        }],
        "layout": {
            "map": {
                "style": MAP_STYLE,
                "zoom": MAP_ZOOM,
                "center": { "lat": MAP_CENTER.0, "lon": MAP_CENTER.1 },
            },
            "margin": { "r": 0, "t": 0, "l": 0, "b": 0 },
        },
    })
}

pub fn render_map_page(
    year: Year,
    countries: &CountrySeries,
    geojson: &Value,
) -> Result<String, GhgError> {
    let figure = figure(year, countries, geojson);
    let figure_json =
        serde_json::to_string(&figure).map_err(|err| GhgError::Render(err.to_string()))?;
    // Keep the payload from closing the script element early.
    let figure_json = figure_json.replace("</", "<\\/");

    Ok(format!(
        r#"<html>
    <head>
        <title>{PAGE_TITLE}</title>
        <meta charset="utf-8" />
        <script src="{PLOTLY_JS_URL}"></script>
    </head>
    <body>
        <div id="emission-map" style="height:100vh;width:100%;"></div>
        <script>
            const figure = {figure_json};
            Plotly.newPlot("emission-map", figure.data, figure.layout, {{responsive: true}});
        </script>
    </body>
</html>
"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CountryCode;

    fn year(value: u16) -> Year {
        Year::new(value).unwrap()
    }

    #[test]
    fn palette_alternates_with_year_parity() {
        assert_eq!(Palette::for_year(year(2018)), Palette::Icefire);
        assert_eq!(Palette::for_year(year(2017)), Palette::Viridis);
        assert_eq!(Palette::Viridis.colorscale(), json!("Viridis"));
        let icefire = Palette::Icefire.colorscale();
        assert_eq!(icefire[0][0], json!(0.0));
        assert_eq!(icefire[16][0], json!(1.0));
    }

    #[test]
    fn log_transform_blanks_non_positive() {
        assert_eq!(log_emission(1), Some(0.0));
        assert_eq!(log_emission(0), None);
        assert_eq!(log_emission(-4), None);
    }

    #[test]
    fn page_embeds_locations_and_values() {
        let usa: CountryCode = "USA".parse().unwrap();
        let can: CountryCode = "CAN".parse().unwrap();
        let countries = CountrySeries::new(vec![(usa, 10), (can, 0)]);
        let geojson = json!({"type": "FeatureCollection", "features": []});

        let figure = figure(year(2017), &countries, &geojson);
        assert_eq!(figure["data"][0]["locations"], json!(["USA", "CAN"]));
        assert_eq!(figure["data"][0]["z"][1], Value::Null);
        assert_eq!(figure["data"][0]["customdata"], json!([10, 0]));

        let page = render_map_page(year(2017), &countries, &geojson).unwrap();
        assert!(page.contains("<title>Emission Plot</title>"));
        assert!(page.contains("choroplethmap"));
    }
}

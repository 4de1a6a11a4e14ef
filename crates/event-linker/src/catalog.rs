//! Built-in catalog of oil market events
//!
//! Used when no event file is supplied.

use analysis_core::{Event, EventCatalog};
use chrono::NaiveDate;

const KEY_EVENTS: &[((i32, u32, u32), &str, &str)] = &[
    ((1987, 10, 19), "Black Monday", "Global stock market crash impacting oil demand"),
    ((1988, 7, 3), "Iran Air Flight 655 shot down", "Rising tensions in the Persian Gulf"),
    ((1989, 3, 24), "Exxon Valdez oil spill", "Major US oil spill, environmental crisis"),
    ((1990, 8, 2), "Iraq invades Kuwait", "First Gulf War, oil price surge due to supply fears"),
    ((1991, 1, 17), "Operation Desert Storm", "Coalition airstrikes in Iraq/Kuwait"),
    ((1991, 12, 25), "Collapse of Soviet Union", "Geopolitical shifts in oil supply"),
    ((1993, 1, 1), "North American Free Trade Agreement signed", "Trade agreement impacts global flows"),
    ((1997, 7, 2), "Asian Financial Crisis begins", "Reduced oil demand in Asia"),
    ((1998, 3, 23), "OPEC cuts oil production", "Attempt to boost falling prices"),
    ((1999, 3, 23), "NATO bombing of Yugoslavia", "Political uncertainty in Balkans"),
    ((2000, 9, 28), "Second Intifada begins", "Heightened tensions in Middle East"),
    ((2001, 9, 11), "September 11 attacks", "Global economic uncertainty"),
    ((2002, 3, 4), "Venezuela coup attempt", "Oil supply risk in Venezuela"),
    ((2003, 3, 20), "Iraq War begins", "Major oil producer at war"),
    ((2004, 10, 1), "Chinese oil demand surges", "Start of China's major consumption era"),
    ((2005, 8, 29), "Hurricane Katrina", "Damages US oil infrastructure"),
    ((2006, 7, 12), "Israel-Hezbollah War", "Supply risk in Lebanon"),
    ((2007, 12, 1), "Great Recession begins", "Global financial crisis"),
    ((2008, 7, 11), "Oil peaks at $147/barrel", "Speculation and demand spike"),
    ((2008, 9, 15), "Lehman Brothers collapse", "Financial system shock"),
    ((2009, 3, 10), "OPEC cuts output by 4.2 million barrels/day", "Post-crash response"),
    ((2010, 4, 20), "Deepwater Horizon oil spill", "US Gulf environmental disaster"),
    ((2011, 1, 25), "Arab Spring begins", "Middle East instability"),
    ((2011, 2, 15), "Libyan Civil War", "Supply loss from major producer"),
    ((2012, 7, 1), "EU bans Iranian oil imports", "Sanctions hit Iran exports"),
    ((2013, 6, 4), "US shale oil boom accelerates", "Changing global supply dynamics"),
    ((2014, 6, 5), "ISIS captures Mosul", "Instability in Iraq oil region"),
    ((2014, 11, 27), "OPEC refuses production cut", "Oil price collapse begins"),
    ((2015, 7, 14), "Iran nuclear deal agreed", "Lifting sanctions on Iran oil"),
    ((2016, 11, 30), "OPEC & Russia agree output cut", "Joint supply reduction"),
    ((2017, 6, 5), "Qatar diplomatic crisis", "Gulf states cut ties with Qatar"),
    ((2018, 5, 8), "US exits Iran nuclear deal", "Sanctions on Iran reimposed"),
    ((2019, 9, 14), "Attack on Saudi Aramco", "Largest single-day oil price spike"),
    ((2019, 12, 31), "COVID-19 first reported", "Future demand shock brewing"),
    ((2020, 3, 9), "Oil price war & COVID-19", "Demand shock, Saudi-Russia price war"),
    ((2020, 4, 20), "US oil price goes negative", "Futures contracts expire, storage crisis"),
    ((2021, 3, 23), "Ever Given blocks Suez Canal", "Shipping, oil delayed"),
    ((2021, 12, 1), "Omicron COVID variant identified", "Market fears new demand drops"),
    ((2022, 2, 24), "Russia invades Ukraine", "Major supply fears, sanctions begin"),
    ((2022, 3, 8), "US/EU ban Russian oil imports", "Escalation of sanctions"),
];

/// Major oil market events from 1987 to 2022, in date order.
pub fn key_events() -> EventCatalog {
    let events = KEY_EVENTS
        .iter()
        .filter_map(|&((y, m, d), label, description)| {
            NaiveDate::from_ymd_opt(y, m, d).map(|date| Event::new(date, label, description))
        })
        .collect();
    EventCatalog::new(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_events_complete_and_sorted() {
        let catalog = key_events();
        assert_eq!(catalog.len(), KEY_EVENTS.len());
        assert!(catalog.events().windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[test]
    fn test_key_events_contains_gulf_war() {
        let catalog = key_events();
        let start = NaiveDate::from_ymd_opt(1990, 8, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(1990, 8, 31).unwrap();
        let hits = catalog.between(start, end);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].label, "Iraq invades Kuwait");
    }
}

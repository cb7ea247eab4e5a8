pub mod shared {
    pub mod config;
}

pub mod modules {
    pub mod directory {
        pub mod in_memory;
        pub mod records;
        pub mod store;
    }
    pub mod identity {
        pub mod accounts;
        pub mod http;
        pub mod oauth;
        pub mod password;
        pub mod session;
    }
    pub mod scheduling {
        pub mod booking;
        pub mod calendar;
        pub mod dashboards;
        pub mod google_calendar;
        pub mod http;
        pub mod in_memory_calendar;
        pub mod slots;
    }
    pub mod assistant {
        pub mod agent;
        pub mod gemini;
        pub mod model;
        pub mod retrieval;
        pub mod ws;
    }
}

pub mod shell;

#[cfg(test)]
pub mod tests {
    pub mod fixtures;

    pub mod e2e {
        pub mod booking_flow_tests;
    }
}

pub const DEFAULT_CLASSROOMS: [&str; 10] = [
    "101", "102", "103", "104", "105", "201", "202", "203", "204", "205",
];

/// The classrooms a faculty user may share with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRegistry {
    rooms: Vec<String>,
}

impl RoomRegistry {
    pub fn new<I, S>(rooms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self { rooms: Vec::new() };
        for room in rooms {
            let room = room.into().trim().to_string();
            if !room.is_empty() && !registry.contains(&room) {
                registry.rooms.push(room);
            }
        }
        registry
    }

    pub fn contains(&self, room_number: &str) -> bool {
        self.rooms.iter().any(|room| room == room_number)
    }

    pub fn rooms(&self) -> &[String] {
        &self.rooms
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CLASSROOMS)
    }
}
